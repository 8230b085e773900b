pub mod enumerator;
pub mod invoker;
pub mod scanner;
pub mod session;
pub mod staging;

pub use enumerator::{ChangeEnumerator, ChangeSet};
pub use invoker::{invoke, sync_back};
pub use scanner::{ScannedFile, TreeScanner};
pub use session::{run_session, stage_and_invoke, SessionReport, SessionRequest};
pub use staging::StagingArea;
