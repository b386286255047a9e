use std::fmt;

/// Branch target inside one method body
///
/// Labels are only meaningful relative to the generator of the body they were made for.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct SynLabel(u32);

impl SynLabel {
    /// First label of every body
    pub const START: SynLabel = SynLabel(0);
}

impl fmt::Debug for SynLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":L{}", self.0)
    }
}

/// Source of labels that are unused so far
pub trait LabelGenerator<Label> {
    fn fresh_label(&mut self) -> Label;
}

/// Label counter of a method body
///
/// The counter travels with the body (see [`super::Code::label_generator`]), so a later rewrite
/// of the same body keeps producing labels distinct from all existing ones. Cloning copies the
/// counter: both copies hand out the same sequence.
#[derive(Clone, Debug, Default)]
pub struct SynLabelGenerator {
    next: u32,
}

impl LabelGenerator<SynLabel> for SynLabelGenerator {
    fn fresh_label(&mut self) -> SynLabel {
        let label = SynLabel(self.next);
        self.next += 1;
        label
    }
}
