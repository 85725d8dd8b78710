//! The state-diff layer in front of the device.
//!
//! Redundant fixed-function state changes are one of the classic costs of an
//! imperative device, so every tracked axis goes through a compare-then-mutate
//! step: the last value issued to the device is remembered, and a device call
//! is produced only when the requested value differs. Each step is a pure
//! function over the state record, so the logic is testable without a device.

use smallvec::SmallVec;

/// The blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Equation {
    Add,
    Subtract,
    ReverseSubtract,
}

/// A blend factor of the source or destination term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceAlpha,
    OneMinusSourceAlpha,
    SourceColor,
    OneMinusSourceColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
}

/// A complete blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blend {
    pub equation: Equation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl Blend {
    /// Standard premultiplied-free alpha blending.
    pub const ALPHA: Blend = Blend {
        equation: Equation::Add,
        src: BlendFactor::SourceAlpha,
        dst: BlendFactor::OneMinusSourceAlpha,
    };

    /// Additive blending.
    pub const ADDITIVE: Blend = Blend {
        equation: Equation::Add,
        src: BlendFactor::SourceAlpha,
        dst: BlendFactor::One,
    };
}

/// Which faces are discarded by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Nothing,
    Front,
    Back,
}

/// The winding treated as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFaceOrder {
    Clockwise,
    CounterClockwise,
}

/// A single mutation of the fixed-function pipeline, ready to hand to the
/// device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateOp {
    DepthTest(bool),
    DepthWrite(bool),
    Blend(Option<Blend>),
    CullFace(CullFace),
    FrontFace(FrontFaceOrder),
    PolygonOffset(Option<(f32, f32)>),
    LineWidth(f32),
}

/// The last value issued to the device per tracked axis. `None` means
/// unknown, so the first request on that axis is always issued.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineState {
    pub depth_test: Option<bool>,
    pub depth_write: Option<bool>,
    pub blend: Option<Option<Blend>>,
    pub cull_face: Option<CullFace>,
    pub front_face: Option<FrontFaceOrder>,
    pub polygon_offset: Option<Option<(f32, f32)>>,
    pub line_width: Option<f32>,
}

/// Tracks `PipelineState` and turns requested values into the minimal set of
/// device mutations.
#[derive(Debug, Default)]
pub struct StateDiff {
    current: PipelineState,
}

fn step<T: PartialEq + Copy>(current: &mut Option<T>, requested: T) -> Option<T> {
    if *current == Some(requested) {
        None
    } else {
        *current = Some(requested);
        Some(requested)
    }
}

impl StateDiff {
    /// Creates a `StateDiff` with every axis unknown.
    pub fn new() -> Self {
        Default::default()
    }

    /// Forgets everything issued so far. The next request on every axis will
    /// be issued unconditionally.
    pub fn reset(&mut self) {
        self.current = Default::default();
    }

    /// The last-issued values.
    pub fn current(&self) -> &PipelineState {
        &self.current
    }

    pub fn depth_test(&mut self, v: bool) -> Option<StateOp> {
        step(&mut self.current.depth_test, v).map(StateOp::DepthTest)
    }

    pub fn depth_write(&mut self, v: bool) -> Option<StateOp> {
        step(&mut self.current.depth_write, v).map(StateOp::DepthWrite)
    }

    pub fn blend(&mut self, v: Option<Blend>) -> Option<StateOp> {
        step(&mut self.current.blend, v).map(StateOp::Blend)
    }

    pub fn polygon_offset(&mut self, v: Option<(f32, f32)>) -> Option<StateOp> {
        step(&mut self.current.polygon_offset, v).map(StateOp::PolygonOffset)
    }

    pub fn line_width(&mut self, v: f32) -> Option<StateOp> {
        step(&mut self.current.line_width, v).map(StateOp::LineWidth)
    }

    /// Resolves a material's sidedness into cull mode and winding order, and
    /// diffs both axes.
    pub fn face_culling(&mut self, double_sided: bool, flip_sided: bool) -> SmallVec<[StateOp; 2]> {
        let cull = if double_sided {
            CullFace::Nothing
        } else {
            CullFace::Back
        };
        let order = if flip_sided {
            FrontFaceOrder::Clockwise
        } else {
            FrontFaceOrder::CounterClockwise
        };

        let mut ops = SmallVec::new();
        if let Some(v) = step(&mut self.current.cull_face, cull) {
            ops.push(StateOp::CullFace(v));
        }
        if let Some(v) = step(&mut self.current.front_face, order) {
            ops.push(StateOp::FrontFace(v));
        }
        ops
    }
}
