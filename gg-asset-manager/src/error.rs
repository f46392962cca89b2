use std::io;
use std::path::Path;
use std::sync::Arc;

use gg_util::eyre::Report;

use crate::{AssetId, AssetKind};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AssetError {
    #[error("asset file not found: {}", .0.display())]
    NotFound(Arc<Path>),

    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: Arc<Path>, message: String },

    #[error("no loader registered for {0} assets")]
    UnknownKind(AssetKind),

    #[error("asset {id} is already registered as {existing}, requested as {requested}")]
    KindMismatch {
        id: AssetId,
        existing: AssetKind,
        requested: AssetKind,
    },

    #[error("dependency {dependency} of {id} did not load")]
    DependencyFailed { id: AssetId, dependency: AssetId },

    #[error("finishing step failed for {id}: {message}")]
    Finish { id: AssetId, message: String },

    #[error("asset manager is shutting down")]
    ShuttingDown,

    #[error("asset {0} is not ready")]
    NotReady(AssetId),

    #[error("cannot block on {0} from inside update")]
    ReentrantWait(AssetId),

    #[error("loading {0} was abandoned")]
    Cancelled(AssetId),
}

impl AssetError {
    /// Classifies a loader failure for the asset at `path`.
    pub(crate) fn from_report(path: &Arc<Path>, report: &Report) -> AssetError {
        for cause in report.chain() {
            if let Some(error) = cause.downcast_ref::<AssetError>() {
                return error.clone();
            }

            if let Some(error) = cause.downcast_ref::<io::Error>() {
                if error.kind() == io::ErrorKind::NotFound {
                    return AssetError::NotFound(path.clone());
                }
            }
        }

        AssetError::Decode {
            path: path.clone(),
            message: format!("{:#}", report),
        }
    }
}
