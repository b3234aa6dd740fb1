//! 测试用的 ast-grep 替身
//!
//! 从工作目录的 `zsg_stub.json` 读取脚本，按 `--pattern` 的值（rule 查询用 "rule"）
//! 选择要输出的行。收到的参数追加写入 `zsg_stub_args.log`。

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::io::Write;
use std::time::Duration;

const CONFIG_FILE: &str = "zsg_stub.json";
const ARGS_LOG: &str = "zsg_stub_args.log";

#[derive(Debug, Default, Deserialize)]
struct StubConfig {
    #[serde(default)]
    scripts: FxHashMap<String, Script>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Script {
    lines: Vec<String>,
    /// 每行之后的停顿
    delay_ms: u64,
    /// 每行拆成两次 write
    split: bool,
    exit_code: i32,
    stderr: Option<String>,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    log_args(&args);

    let config: StubConfig = std::fs::read_to_string(CONFIG_FILE)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default();

    let key = if args.first().map(String::as_str) == Some("scan") {
        "rule".to_string()
    } else {
        args.iter()
            .position(|a| a == "--pattern")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_default()
    };

    let Some(script) = config.scripts.get(&key) else {
        return;
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in &script.lines {
        let bytes = line.as_bytes();
        if script.split && bytes.len() > 1 {
            let mid = bytes.len() / 2;
            let _ = out.write_all(&bytes[..mid]);
            let _ = out.flush();
            std::thread::sleep(Duration::from_millis(20));
            let _ = out.write_all(&bytes[mid..]);
        } else {
            let _ = out.write_all(bytes);
        }
        let _ = out.write_all(b"\n");
        let _ = out.flush();
        if script.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(script.delay_ms));
        }
    }

    if let Some(stderr) = script.stderr.as_deref() {
        eprintln!("{stderr}");
    }
    std::process::exit(script.exit_code);
}

fn log_args(args: &[String]) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ARGS_LOG)
    else {
        return;
    };
    let _ = writeln!(file, "{}", serde_json::to_string(args).unwrap_or_default());
}
