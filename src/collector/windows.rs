//! Windows input capture using low-level hooks.
//!
//! Installs `WH_KEYBOARD_LL` and `WH_MOUSE_LL` hooks on a dedicated thread
//! running a message loop. Key-down events are translated to [`Key`] and
//! handed to the [`InputHook`]; any mouse event is an activity ping. The hook
//! procedures must return quickly, so they only ever `try_send`.
//!
//! [`Key`]: crate::collector::Key

use crate::collector::hook::{CollectorError, InputHook};
use crate::collector::keymap::{key_from_virtual_key, Modifiers};
use crossbeam_channel::{bounded, Sender};
use std::cell::RefCell;
use std::thread::{self, JoinHandle};
use tracing::{error, info};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, GetKeyState, VK_CAPITAL, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL,
    WM_KEYDOWN, WM_QUIT, WM_SYSKEYDOWN, WM_USER,
};

/// The Windows input collector.
pub struct WindowsCollector {
    hook: InputHook,
    /// Hook thread id (for posting `WM_QUIT`) and its handle
    hook_thread: Option<(u32, JoinHandle<()>)>,
}

impl WindowsCollector {
    pub fn new(hook: InputHook) -> Self {
        Self {
            hook,
            hook_thread: None,
        }
    }

    /// Install the hooks on a background thread.
    ///
    /// Returns once both hooks are installed, or with the installation error.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.hook_thread.is_some() {
            return Err(CollectorError::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = bounded(1);
        let hook = self.hook.clone();
        let handle = thread::Builder::new()
            .name("input-hook".to_string())
            .spawn(move || run_hook_loop(hook, ready_tx))
            .map_err(|e| CollectorError::HookInstallationFailed(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.hook_thread = Some((thread_id, handle));
                info!("input hooks installed");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CollectorError::HookInstallationFailed(
                    "hook thread exited before installing hooks".to_string(),
                ))
            }
        }
    }

    /// Remove the hooks and join the hook thread.
    pub fn stop(&mut self) {
        if let Some((thread_id, handle)) = self.hook_thread.take() {
            if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
                error!("could not stop input hook thread: {e}");
                return;
            }
            if handle.join().is_err() {
                error!("input hook thread panicked");
            }
            info!("input hooks removed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.hook_thread.is_some()
    }
}

impl Drop for WindowsCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

// Hook procedures run on the thread that installed them, so the handle lives
// in thread-local storage rather than a global.
thread_local! {
    static INPUT_HOOK: RefCell<Option<InputHook>> = const { RefCell::new(None) };
}

fn current_modifiers() -> Modifiers {
    unsafe {
        Modifiers {
            shift: GetAsyncKeyState(i32::from(VK_SHIFT.0)) < 0,
            caps_lock: GetKeyState(i32::from(VK_CAPITAL.0)) & 1 != 0,
        }
    }
}

/// Low-level keyboard hook callback.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 && matches!(w_param.0 as u32, WM_KEYDOWN | WM_SYSKEYDOWN) {
        let kb_struct = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key = key_from_virtual_key(kb_struct.vkCode, current_modifiers());

        INPUT_HOOK.with(|hook| {
            if let Some(hook) = hook.borrow().as_ref() {
                // Drops are counted by the hook.
                let _ = hook.on_key(key);
            }
        });
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        INPUT_HOOK.with(|hook| {
            if let Some(hook) = hook.borrow().as_ref() {
                hook.on_mouse();
            }
        });
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Install both hooks, report the thread id, then pump messages until
/// `WM_QUIT`.
fn run_hook_loop(hook: InputHook, ready: Sender<Result<u32, CollectorError>>) {
    INPUT_HOOK.with(|slot| *slot.borrow_mut() = Some(hook));

    let hooks = unsafe { install_hooks() };
    let hooks = match hooks {
        Ok(hooks) => hooks,
        Err(e) => {
            let _ = ready.send(Err(e));
            INPUT_HOOK.with(|slot| slot.borrow_mut().take());
            return;
        }
    };

    let mut msg = MSG::default();
    unsafe {
        // Create the message queue before the id is handed out, so a quick
        // stop cannot post WM_QUIT into nothing.
        let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);
        let _ = ready.send(Ok(GetCurrentThreadId()));

        // Hook procedures are called from inside GetMessageW.
        while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {}

        for hook in hooks {
            let _ = UnhookWindowsHookEx(hook);
        }
    }

    INPUT_HOOK.with(|slot| slot.borrow_mut().take());
}

unsafe fn install_hooks() -> Result<Vec<HHOOK>, CollectorError> {
    let keyboard = SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0)
        .map_err(|e| CollectorError::HookInstallationFailed(e.to_string()))?;

    match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) {
        Ok(mouse) => Ok(vec![keyboard, mouse]),
        Err(e) => {
            let _ = UnhookWindowsHookEx(keyboard);
            Err(CollectorError::HookInstallationFailed(e.to_string()))
        }
    }
}
