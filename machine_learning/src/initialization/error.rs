use rand_distr::uniform::Error as UniformError;

use crate::MlErr;

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::Init(value.to_string())
    }
}
