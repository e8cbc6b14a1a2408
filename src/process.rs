use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// 逆アセンブラの出力。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,

    /// タイムアウトした場合、`stdout` と `stderr` はそこまでに読めた分だけ。
    pub timed_out: bool,
}

#[derive(Debug)]
enum Chunk {
    Stdout(String),
    Stderr(String),
}

fn spawn_reader<R, F>(rdr: R, tx: Sender<Chunk>, wrap: F)
where
    R: Read + Send + 'static,
    F: Fn(String) -> Chunk + Send + 'static,
{
    thread::spawn(move || {
        let mut rdr = BufReader::new(rdr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match rdr.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("reader stopped, output may be truncated: {}", e);
                    break;
                }
            }

            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }

            // UTF-8 として不正なバイトは置換文字にして読み続ける。
            let line = String::from_utf8_lossy(&buf).into_owned();
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

/// 外部の逆アセンブラを実行し、標準出力と標準エラーを回収する。
///
/// プロセスの終了と両ストリームの読み切りを `timeout` 以内に待つ。間に合わなければプロセスを
/// kill し、読めた分だけを返す。`timeout` が大きすぎて期限を表せない場合は無期限に待つ。
pub fn run_disassembler<P, I, A>(program: P, args: I, timeout: Duration) -> ProcessResult<Captured>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let program = program.as_ref();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ProcessError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source: e,
        })?;

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone(), Chunk::Stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone(), Chunk::Stderr);
    }
    drop(tx);

    let deadline = Instant::now().checked_add(timeout);
    let mut captured = Captured::default();

    // 両方のリーダーが終わるとチャンネルが切断される。
    let drained = loop {
        let chunk = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match chunk {
            Ok(Chunk::Stdout(line)) => {
                captured.stdout.push_str(&line);
                captured.stdout.push('\n');
            }
            Ok(Chunk::Stderr(line)) => {
                captured.stderr.push_str(&line);
                captured.stderr.push('\n');
            }
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => break false,
        }
    };

    let exited = drained && wait_until(&mut child, deadline)?;
    if !exited {
        log::warn!("{} timed out after {:?}", program.to_string_lossy(), timeout);
        captured.timed_out = true;
        if let Err(e) = child.kill() {
            log::debug!("kill failed: {}", e);
        }
        child.wait()?;
    }

    Ok(captured)
}

fn wait_until(child: &mut std::process::Child, deadline: Option<Instant>) -> ProcessResult<bool> {
    let deadline = match deadline {
        Some(deadline) => deadline,
        None => {
            report_exit(child.wait()?);
            return Ok(true);
        }
    };

    loop {
        if let Some(status) = child.try_wait()? {
            report_exit(status);
            return Ok(true);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }
        thread::sleep(remaining.min(Duration::from_millis(5)));
    }
}

fn report_exit(status: std::process::ExitStatus) {
    if !status.success() {
        log::warn!("disassembler exited with {}", status);
    }
}

/// ndisasm の引数 (`-b<bits> <path>`) を作る。
pub fn ndisasm_args(bits: u32, path: &Path) -> Vec<OsString> {
    vec![format!("-b{}", bits).into(), path.as_os_str().to_owned()]
}
