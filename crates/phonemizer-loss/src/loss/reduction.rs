/// The reduction type for the loss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Reduction {
    /// The mean of the losses will be returned.
    #[default]
    Mean,

    /// The sum of the losses will be returned.
    Sum,

    /// The losses are returned without reduction.
    None,
}
