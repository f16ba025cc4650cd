//! Frame correction between a captured sketch transform and the transform
//! assigned by the engine at replay time.
//!
//! A sketch carries its geometry in sketch-local coordinates. The engine
//! assigns a sketch-to-world transform when the sketch is created, and that
//! transform is not guaranteed to equal the one recorded when the design was
//! captured. Point data replayed verbatim would land at the wrong world
//! position whenever the two frames differ.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Matrix4;

/// The engine-assigned sketch transform could not be inverted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[error("sketch transform is singular and cannot be inverted")]
pub struct SingularTransform;

/// Computes the matrix that maps captured sketch coordinates into the frame
/// of the live sketch.
///
/// For a captured point `p`, `import * (correction * p) == extraction * p`,
/// so applying the correction before insertion reproduces the original world
/// position.
pub fn frame_correction(
    import_transform: &Matrix4,
    extraction_transform: &Matrix4,
) -> Result<Matrix4, SingularTransform> {
    let inverted = import_transform.try_inverse().ok_or(SingularTransform)?;
    Ok(inverted * extraction_transform)
}
