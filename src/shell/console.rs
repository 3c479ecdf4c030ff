//! 菜单的输入源
//!
//! 标准输入由后台线程逐行转发到通道，Ctrl+C也投递到同一个通道，
//! 菜单收到中断时看到的就是输入结束，走正常的退出流程。

use std::io::{self, BufRead, Read};
use std::thread;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// 投递给菜单的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// 一行输入，包含结尾的换行
    Line(String),
    /// 标准输入已关闭
    Closed,
    /// 在菜单中按下Ctrl+C
    Interrupted,
}

/// 从通道读取输入的`BufRead`
pub struct Console {
    events: UnboundedReceiver<ConsoleEvent>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
    interrupted: bool,
}

impl Console {
    pub fn new(events: UnboundedReceiver<ConsoleEvent>) -> Self {
        Self {
            events,
            pending: Vec::new(),
            pos: 0,
            finished: false,
            interrupted: false,
        }
    }

    /// 输入是否因Ctrl+C结束
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

impl Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for Console {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.pending.len() && !self.finished {
            match self.events.blocking_recv() {
                Some(ConsoleEvent::Line(line)) => {
                    self.pending = line.into_bytes();
                    self.pos = 0;
                }
                Some(ConsoleEvent::Interrupted) => {
                    self.interrupted = true;
                    self.finished = true;
                }
                Some(ConsoleEvent::Closed) | None => self.finished = true,
            }
        }
        if self.pos >= self.pending.len() {
            return Ok(&[]);
        }
        Ok(&self.pending[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.pending.len());
    }
}

/// 启动转发标准输入的后台线程
pub fn forward_stdin(events: UnboundedSender<ConsoleEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(ConsoleEvent::Line(format!("{}\n", line))).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        log::warn!("Failed to read standard input: {}", err);
                        break;
                    }
                }
            }
            let _ = events.send(ConsoleEvent::Closed);
        })?;
    Ok(())
}
