use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloudError {
    /// A coordinate component was NaN or infinite.
    #[error("point {point:?} has a non-finite coordinate")]
    NonFinite { point: [f32; 3] },
}
