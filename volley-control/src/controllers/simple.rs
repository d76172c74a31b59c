use crate::traversal::ControllerPolicy;

/// Visits its children in order once per pass
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplePolicy;

impl ControllerPolicy for SimplePolicy {}
