use gpu::RenderFrame;
use runtime::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Per-frame decoration: a pure state advance followed by a render step.
pub trait Layer {
    fn id(&self) -> LayerId;

    fn update(&mut self, _frame: &Frame) {}

    fn render(&self, out: &mut RenderFrame);
}
