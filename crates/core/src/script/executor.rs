use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::error::ScriptError;

/// Splits a command line into arguments, honoring single and double
/// quotes. Quotes are not part of the argument, and every quote
/// boundary ends the argument being built, so a quoted segment is
/// always its own argument. There is no escape character.
pub fn split_args(command: &str) -> Result<Vec<String>, ScriptError> {
    #[derive(PartialEq)]
    enum State {
        Outside,
        SingleQuoted,
        DoubleQuoted,
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut state = State::Outside;

    for c in command.chars() {
        match state {
            State::Outside => match c {
                '\'' | '"' => {
                    if in_word {
                        args.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                    state = if c == '\'' {
                        State::SingleQuoted
                    } else {
                        State::DoubleQuoted
                    };
                }
                c if c.is_whitespace() => {
                    if in_word {
                        args.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
            State::SingleQuoted => match c {
                '\'' => {
                    args.push(std::mem::take(&mut current));
                    state = State::Outside;
                }
                c => current.push(c),
            },
            State::DoubleQuoted => match c {
                '"' => {
                    args.push(std::mem::take(&mut current));
                    state = State::Outside;
                }
                c => current.push(c),
            },
        }
    }

    if state != State::Outside {
        return Err(ScriptError::UnclosedQuote {
            command: command.to_string(),
        });
    }
    if in_word {
        args.push(current);
    }
    if args.is_empty() {
        return Err(ScriptError::EmptyCommand);
    }
    Ok(args)
}

/// Runs a hook script, feeding `input` as a single stdin line and
/// returning the first line of its stdout.
///
/// The script must exit zero within `timeout` and print a non-blank
/// line; anything else is an error. A script that overruns the timeout
/// is killed.
pub async fn invoke_script(
    command: &str,
    input: &str,
    timeout: Duration,
) -> Result<String, ScriptError> {
    let args = split_args(command)?;
    let program = args[0].clone();

    let mut child = Command::new(&args[0])
        .args(&args[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ScriptError::Spawn {
            program: program.clone(),
            source: e,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        let line = format!("{input}\n");
        // A script that exits without reading stdin closes the pipe;
        // its exit status decides the outcome, not the failed write.
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            debug!(program = %program, error = %e, "script closed stdin early");
        }
        // Closing stdin lets line-reading scripts reach EOF.
        drop(stdin);
    }

    // kill_on_drop reaps the child if the timeout fires first.
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ScriptError::TimedOut {
            program: program.clone(),
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| ScriptError::Io {
            program: program.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ScriptError::NonZeroExit {
            program,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap_or("").trim().to_string();
    if line.is_empty() {
        return Err(ScriptError::EmptyOutput { program });
    }
    debug!(command, output = %line, "script returned");
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        let args = split_args("python route.py --fast").unwrap();
        assert_eq!(args, vec!["python", "route.py", "--fast"]);
    }

    #[test]
    fn test_split_quoted_words() {
        let args = split_args(r#"sh -c 'echo "a b"' "last arg""#).unwrap();
        assert_eq!(args, vec!["sh", "-c", r#"echo "a b""#, "last arg"]);
    }

    #[test]
    fn test_split_quote_boundary_ends_argument() {
        let args = split_args(r#"run a"b c"d"#).unwrap();
        assert_eq!(args, vec!["run", "a", "b c", "d"]);
    }

    #[test]
    fn test_split_unclosed_quote() {
        assert!(matches!(
            split_args("run 'oops"),
            Err(ScriptError::UnclosedQuote { .. })
        ));
    }

    #[test]
    fn test_split_empty_command() {
        assert!(matches!(split_args("   "), Err(ScriptError::EmptyCommand)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[tokio::test]
        async fn test_invoke_echoes_first_line() {
            let out = invoke_script(
                "/bin/sh -c 'read line; echo \"$line-routed\"; echo extra'",
                "file:/in/a.txt",
                Duration::from_secs(5),
            )
            .await
            .unwrap();
            assert_eq!(out, "file:/in/a.txt-routed");
        }

        #[tokio::test]
        async fn test_invoke_non_zero_exit() {
            let err = invoke_script(
                "/bin/sh -c 'echo nope >&2; exit 3'",
                "x",
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
            match err {
                ScriptError::NonZeroExit { status, stderr, .. } => {
                    assert_eq!(status, 3);
                    assert_eq!(stderr, "nope");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_invoke_blank_output() {
            let err = invoke_script("/bin/sh -c 'echo'", "x", Duration::from_secs(5))
                .await
                .unwrap_err();
            assert!(matches!(err, ScriptError::EmptyOutput { .. }));
        }

        #[tokio::test]
        async fn test_invoke_timeout_kills_script() {
            let err = invoke_script(
                "/bin/sh -c 'sleep 30'",
                "x",
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ScriptError::TimedOut { .. }));
        }

        #[tokio::test]
        async fn test_invoke_missing_program() {
            let err = invoke_script(
                "/definitely/not/a/program",
                "x",
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ScriptError::Spawn { .. }));
        }
    }
}
