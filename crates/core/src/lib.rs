pub mod codec;
pub mod config;
pub mod fs;
pub mod manager;
pub mod pool;
pub mod script;
pub mod worker;

pub use codec::{create_codec, Codec, CodecError, FinishWrite, GzipCodec};
pub use config::{
    load_config, load_config_from_str, prepare_directories, validate_config, Config, ConfigError,
    DirectoriesConfig, ScriptsConfig, TransferConfig,
};
pub use fs::{same_filesystem, FileMeta, FileSystem, FileUri, FsError, FsRouter, LocalFs, MemFs};
pub use manager::{ClaimedFile, DirManager, ManagedDirs, ManagerError};
pub use pool::WorkerPool;
pub use script::{invoke_script, split_args, ScriptError};
pub use worker::{IngestError, IngestWorker, WorkerOptions};
