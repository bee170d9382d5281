pub mod cpu;
pub mod frontend;

/// How a kernel evaluates its per-element math, chosen once at configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecStrategy {
    /// One element at a time.
    Scalar,
    /// Whole vectors per window step.
    #[default]
    Vector,
}
