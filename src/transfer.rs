// transfer module: remote sessions (SFTP / FTPS) and the download/upload orchestration
mod ftps;
mod helpers;
mod orchestrator;
mod params;
mod remote;
mod selection;
mod session;
mod sftp;

pub use ftps::FtpsConnection;
pub use helpers::{
    cumulative_paths, file_name, join_remote, normalize_path, normalize_relative, parent_dir,
    remote_base,
};
pub use orchestrator::{
    ArchiveEntry, DownloadResult, TransferItem, UploadResult, download, select, upload,
};
pub use params::{ConnectionParameters, Protocol, Timeouts};
pub use remote::{DirOutcome, RemoteConnection, RemoteEntry, ensure_segments, open};
pub use selection::{SelectionCriteria, parse_not_before};
pub use sftp::SftpConnection;
