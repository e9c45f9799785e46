use std::convert::Infallible;

use derive_more::{Display, From};

use crate::object_id::{CommitId, ObjectId};

/// Everything that can go wrong in the repository core.
///
/// The core never terminates the process, it hands one of these back and
/// the command layer decides how to present it.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display(fmt = "i/o failure: {}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "corrupt repository data: {}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "object {} is missing from the store", _0)]
    MissingObject(ObjectId),

    #[display(fmt = "a repository already exists in {}", _0)]
    AlreadyInitialized(String),
    #[display(fmt = "not in an initialized repository: {}", _0)]
    NotInitialized(String),
    #[display(fmt = "incorrect operands")]
    IncorrectOperands,
    #[display(fmt = "please enter a commit message")]
    EmptyMessage,
    #[display(fmt = "no changes added to the commit")]
    NothingToCommit,
    #[display(fmt = "no reason to remove {}", _0)]
    NothingToRemove(String),
    #[display(fmt = "file does not exist: {}", _0)]
    FileNotFound(String),
    #[display(fmt = "refusing to touch path outside the work tree: {}", _0)]
    InvalidPath(String),
    #[display(fmt = "invalid branch name: {:?}", _0)]
    InvalidBranchName(String),
    #[display(fmt = "you have uncommitted changes")]
    UncommittedChanges,

    #[display(fmt = "a branch named {} already exists", _0)]
    DuplicateBranch(String),
    #[display(fmt = "no branch named {}", _0)]
    BranchNotFound(String),
    #[display(fmt = "no commit with id {}", _0)]
    CommitNotFound(String),
    #[display(fmt = "commit id {} is ambiguous", _0)]
    AmbiguousCommit(String),
    #[display(fmt = "{} does not exist in commit {}", path, commit)]
    FileNotFoundInCommit { path: String, commit: CommitId },
    #[display(fmt = "found no commit with message {:?}", _0)]
    NoCommitFound(String),

    #[display(fmt = "cannot remove the current branch {}", _0)]
    CannotRemoveCurrent(String),
    #[display(fmt = "cannot merge branch {} with itself", _0)]
    SelfMerge(String),
    #[display(fmt = "commits {} and {} share no history", _0, _1)]
    NoCommonAncestor(CommitId, CommitId),
}

impl std::error::Error for Error {}

/// Coarse classification of an [`Error`], mirroring how the command layer reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Bad operands or preconditions the user can fix and retry.
    UserInput,
    /// An unknown branch, commit or path.
    NotFound,
    /// The request would break a repository invariant.
    InvariantViolation,
    /// The backing storage failed or holds unreadable data.
    Storage,
}

impl Error {
    pub fn category(&self) -> Category {
        use Error::*;
        match self {
            IO(_) | Serde(_) | MissingObject(_) | NoCommonAncestor(..) => Category::Storage,
            AlreadyInitialized(_)
            | NotInitialized(_)
            | IncorrectOperands
            | EmptyMessage
            | NothingToCommit
            | NothingToRemove(_)
            | FileNotFound(_)
            | InvalidPath(_)
            | InvalidBranchName(_)
            | UncommittedChanges => Category::UserInput,
            DuplicateBranch(_) | CannotRemoveCurrent(_) | SelfMerge(_) => {
                Category::InvariantViolation
            }
            BranchNotFound(_)
            | CommitNotFound(_)
            | AmbiguousCommit(_)
            | FileNotFoundInCommit { .. }
            | NoCommitFound(_) => Category::NotFound,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[test]
fn test_categories() {
    assert_eq!(Error::EmptyMessage.category(), Category::UserInput);
    assert_eq!(
        Error::BranchNotFound("dev".into()).category(),
        Category::NotFound
    );
    assert_eq!(
        Error::CannotRemoveCurrent("main".into()).category(),
        Category::InvariantViolation
    );
    assert_eq!(
        Error::SelfMerge("main".into()).to_string(),
        "cannot merge branch main with itself"
    );
}
