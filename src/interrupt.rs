use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc::UnboundedSender;

use crate::shell::console::ConsoleEvent;

/// 轮询循环的停止信号
pub trait StopSignal {
    /// 是否已经请求停止
    fn is_raised(&self) -> bool;

    /// 等待`timeout`，期间收到停止请求时提前返回`true`
    fn wait(&self, timeout: Duration) -> bool;

    /// 循环开始前调用
    fn arm(&self) {}

    /// 循环结束后调用
    fn disarm(&self) {}
}

/// 由Ctrl+C触发的停止信号
///
/// 轮询时（armed）Ctrl+C只请求停止循环；在菜单中按Ctrl+C通知菜单退出，
/// 没有菜单时直接退出进程。
#[derive(Default)]
pub struct Interrupt {
    raised: Mutex<bool>,
    wakeup: Condvar,
    armed: AtomicBool,
    menu: Mutex<Option<UnboundedSender<ConsoleEvent>>>,
}

/// 一次Ctrl+C的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlC {
    /// 已请求轮询循环停止
    StopLoop,
    /// 已通知菜单退出
    QuitMenu,
    /// 没有可通知的对象，需要退出进程
    Exit,
}

/// Ctrl+C时进程的退出码
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

impl Interrupt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 安装Ctrl+C监听线程
    pub fn install() -> anyhow::Result<Arc<Self>> {
        let interrupt = Self::new();
        Self::listen(&interrupt)?;
        Ok(interrupt)
    }

    /// 安装Ctrl+C监听线程，菜单中的Ctrl+C投递到`menu`
    pub fn install_with_menu(menu: UnboundedSender<ConsoleEvent>) -> anyhow::Result<Arc<Self>> {
        let interrupt = Self::new();
        *interrupt.menu.lock() = Some(menu);
        Self::listen(&interrupt)?;
        Ok(interrupt)
    }

    fn listen(interrupt: &Arc<Self>) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let listener = interrupt.clone();
        thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                loop {
                    if let Err(err) = runtime.block_on(tokio::signal::ctrl_c()) {
                        log::error!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    if listener.on_ctrl_c() == CtrlC::Exit {
                        std::process::exit(INTERRUPTED_EXIT_CODE);
                    }
                }
            })?;
        Ok(())
    }

    /// 处理一次Ctrl+C
    pub fn on_ctrl_c(&self) -> CtrlC {
        if self.is_armed() {
            log::info!("🛑 Stop requested, leaving the loop...");
            self.raise();
            return CtrlC::StopLoop;
        }

        log::info!("👋 Interrupted, exiting...");
        match self.menu.lock().as_ref() {
            Some(menu) if menu.send(ConsoleEvent::Interrupted).is_ok() => CtrlC::QuitMenu,
            _ => CtrlC::Exit,
        }
    }

    /// 进入轮询：清除旧的停止请求
    pub fn arm(&self) {
        *self.raised.lock() = false;
        self.armed.store(true, Ordering::SeqCst);
    }

    /// 回到菜单
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// 请求停止并唤醒正在等待的循环
    pub fn raise(&self) {
        *self.raised.lock() = true;
        self.wakeup.notify_all();
    }
}

impl StopSignal for Interrupt {
    fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    fn wait(&self, timeout: Duration) -> bool {
        let mut raised = self.raised.lock();
        if !*raised {
            self.wakeup
                .wait_while_for(&mut raised, |raised| !*raised, timeout);
        }
        *raised
    }

    fn arm(&self) {
        Interrupt::arm(self)
    }

    fn disarm(&self) {
        Interrupt::disarm(self)
    }
}

impl<S: StopSignal + ?Sized> StopSignal for Arc<S> {
    fn is_raised(&self) -> bool {
        (**self).is_raised()
    }

    fn wait(&self, timeout: Duration) -> bool {
        (**self).wait(timeout)
    }

    fn arm(&self) {
        (**self).arm()
    }

    fn disarm(&self) {
        (**self).disarm()
    }
}
