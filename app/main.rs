use std::{
    env::current_dir,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use lib::{dot_rev::DotRev, merge::MergeOutcome, workspace::Workspace, Error};

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(
        short = 'C',
        long,
        global = true,
        help = "work tree to operate in, defaults to the current directory"
    )]
    dir: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "initialize a brand new repository")]
    Init,
    #[clap(about = "stage the current contents of a file")]
    Add { path: String },
    #[clap(about = "seal the staged files into a new commit")]
    Commit { message: String },
    #[clap(about = "untrack a file, deleting it if the head commit tracks it")]
    Rm { path: String },
    #[clap(about = "create a branch at the current head")]
    Branch { name: String },
    #[clap(about = "delete a branch pointer")]
    RmBranch { name: String },
    #[clap(about = "switch branches, or restore a file with `checkout [commit] -- <path>`")]
    Checkout {
        target: Option<String>,
        #[arg(last = true)]
        path: Option<String>,
    },
    #[clap(about = "merge a branch into the current branch")]
    Merge { branch: String },
    #[clap(about = "show the history of the current branch")]
    Log,
    #[clap(about = "show every commit ever made")]
    GlobalLog,
    #[clap(about = "print the ids of commits with the given message")]
    Find { message: String },
    #[clap(about = "show branches and staged changes")]
    Status,
    #[clap(about = "move the current branch to a commit")]
    Reset { commit: String },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{:?} failure: {:?}", err.category(), err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Arguments) -> Result<(), Error> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => current_dir()?,
    };
    match args.cmd {
        Command::Init => {
            DotRev::init(&dir)?;
            Ok(())
        }
        cmd => run_in(&dir, cmd),
    }
}

/// Loads the repository under `dir`, runs `cmd` and persists the result.
/// Nothing is written back when `cmd` fails.
fn run_in(dir: &Path, cmd: Command) -> Result<(), Error> {
    let dot_rev = DotRev::existing(dir)?;
    let mut repo = dot_rev.load()?;
    let mut workspace = dot_rev.workspace()?;
    use Command::*;
    match cmd {
        Init => return Err(Error::AlreadyInitialized(dir.display().to_string())),
        Add { path } => {
            let bytes = workspace
                .read(&path)?
                .ok_or_else(|| Error::FileNotFound(path.clone()))?;
            repo.stage(&path, &bytes)?;
        }
        Commit { message } => {
            repo.commit(&message)?;
        }
        Rm { path } => {
            let tracked = repo.tracked_by_head(&path)?;
            repo.unstage(&path)?;
            if tracked {
                workspace.remove(&path)?;
            }
        }
        Branch { name } => {
            repo.add_branch(&name)?;
        }
        RmBranch { name } => {
            repo.remove_branch(&name)?;
        }
        Checkout { target, path } => match (target, path) {
            (Some(branch), None) => {
                let transition = repo.checkout_branch(&branch)?;
                transition.materialize(repo.store(), &mut workspace)?;
            }
            (commit, Some(path)) => {
                let bytes = repo.checkout_file(&path, commit.as_deref())?;
                workspace.write(&path, &bytes)?;
            }
            (None, None) => return Err(Error::IncorrectOperands),
        },
        Merge { branch } => match repo.merge(&branch, &mut workspace)? {
            MergeOutcome::FastForwardNoop => {
                println!("Given branch is an ancestor of the current branch.")
            }
            MergeOutcome::FastForwardOther { .. } => println!("Current branch fast-forwarded."),
            MergeOutcome::Merged { commit } => println!("{}", commit.message()),
            MergeOutcome::ConflictAborted { conflicts } => {
                println!("Encountered a merge conflict.");
                for path in conflicts {
                    println!("{}", path);
                }
            }
        },
        Log => {
            for commit in repo.log()? {
                println!("{}", commit);
            }
        }
        GlobalLog => {
            for commit in repo.global_log()? {
                println!("{}", commit);
            }
        }
        Find { message } => {
            for id in repo.find_by_message(&message)? {
                println!("{}", id);
            }
        }
        Status => print!("{}", repo.status()?),
        Reset { commit } => {
            let transition = repo.reset(&commit)?;
            transition.materialize(repo.store(), &mut workspace)?;
        }
    }
    dot_rev.flush(&repo)
}
