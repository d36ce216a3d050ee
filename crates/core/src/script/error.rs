use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script command is empty")]
    EmptyCommand,

    #[error("unclosed quote in script command: {command}")]
    UnclosedQuote { command: String },

    #[error("failed to spawn script '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o with script '{program}' failed")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script '{program}' exited with status {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("script '{program}' did not finish within {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    #[error("script '{program}' produced no output")]
    EmptyOutput { program: String },
}
