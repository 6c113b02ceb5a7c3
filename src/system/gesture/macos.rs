//! CGEventTap installation and teardown
//!
//! The tap callback runs on a dedicated thread's CFRunLoop, outside the
//! tokio runtime. It must not block event delivery: classification is a
//! table lookup and dispatch is a channel send (or a detached sleeper thread
//! for the delayed copy read). The event pointer is always returned
//! unmodified so the tap stays pass-through.

use std::os::raw::c_void;
use std::ptr::null_mut;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopRun};
use core_foundation_sys::runloop::{
    CFRunLoopAddSource, CFRunLoopRef, CFRunLoopRemoveSource, CFRunLoopSourceRef, CFRunLoopStop,
};
use core_graphics::event::{CGEventFlags, CGEventTapLocation, CGEventType};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc::UnboundedSender;

use super::{classify_keydown, dispatch_gesture};
use crate::shared::events::AppEvent;

// Direct FFI for CGEventTap
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: i32,   // CGEventTapPlacement
        options: i32, // CGEventTapOptions
        events_of_interest: u64,
        callback: extern "C" fn(
            proxy: *mut c_void,
            event_type: CGEventType,
            event: *mut c_void,
            user_info: *mut c_void,
        ) -> *mut c_void,
        user_info: *mut c_void,
    ) -> *mut c_void;

    fn CGEventTapEnable(tap: *mut c_void, enable: bool);

    fn CFMachPortCreateRunLoopSource(
        allocator: *mut c_void,
        port: *mut c_void,
        order: i64,
    ) -> *mut c_void;

    fn CGEventGetFlags(event: *mut c_void) -> CGEventFlags;

    fn CGEventGetIntegerValueField(event: *mut c_void, field: i32) -> i64;
}

// CGEventTapPlacement
const K_CG_HEAD_INSERT_EVENT_TAP: i32 = 0;

// CGEventTapOptions
const K_CG_EVENT_TAP_OPTION_DEFAULT: i32 = 0;

// CGEventField
const K_CG_KEYBOARD_EVENT_KEYCODE: i32 = 9;

struct TapContext {
    events: UnboundedSender<AppEvent>,
    copy_capture: Arc<AtomicBool>,
    copy_delay_ms: u64,
}

// The C callback gets no safe closure capture; context lives in a
// process-global slot set once at first install. The tap is installed at
// most once per process.
static CONTEXT: OnceCell<TapContext> = OnceCell::new();

static TAP: AtomicPtr<c_void> = AtomicPtr::new(null_mut());
static TAP_SOURCE: AtomicPtr<c_void> = AtomicPtr::new(null_mut());
static TAP_RUNLOOP: AtomicPtr<c_void> = AtomicPtr::new(null_mut());

extern "C" fn keydown_callback(
    _proxy: *mut c_void,
    event_type: CGEventType,
    event: *mut c_void,
    _user_info: *mut c_void,
) -> *mut c_void {
    unsafe {
        if event_type as u32 != CGEventType::KeyDown as u32 {
            return event;
        }
        let Some(context) = CONTEXT.get() else {
            return event;
        };

        let flags = CGEventGetFlags(event);
        let keycode = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE) as u16;
        let command = flags.contains(CGEventFlags::CGEventFlagCommand);
        let capture = context.copy_capture.load(Ordering::SeqCst);

        if let Some(gesture) = classify_keydown(command, keycode, capture) {
            dispatch_gesture(&context.events, gesture, context.copy_delay_ms);
        }

        // Pass-through: never swallow the event
        event
    }
}

/// Install the keydown tap on a dedicated runloop thread.
pub(super) fn install_tap(
    events: UnboundedSender<AppEvent>,
    copy_capture: Arc<AtomicBool>,
    copy_delay_ms: u64,
) -> bool {
    let _ = CONTEXT.set(TapContext {
        events,
        copy_capture,
        copy_delay_ms,
    });

    std::thread::spawn(move || unsafe {
        let mask = 1u64 << CGEventType::KeyDown as u32;

        let tap = CGEventTapCreate(
            CGEventTapLocation::Session,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_DEFAULT,
            mask,
            keydown_callback,
            null_mut(),
        );
        if tap.is_null() {
            eprintln!("[GestureInterceptor] Failed to create event tap");
            return;
        }

        let source = CFMachPortCreateRunLoopSource(null_mut(), tap, 0);
        if source.is_null() {
            eprintln!("[GestureInterceptor] Failed to create runloop source for tap");
            return;
        }

        let run_loop = CFRunLoop::get_current();
        CFRunLoopAddSource(
            run_loop.as_concrete_TypeRef(),
            source as CFRunLoopSourceRef,
            kCFRunLoopDefaultMode,
        );
        CGEventTapEnable(tap, true);

        TAP.store(tap, Ordering::SeqCst);
        TAP_SOURCE.store(source, Ordering::SeqCst);
        TAP_RUNLOOP.store(run_loop.as_concrete_TypeRef() as *mut c_void, Ordering::SeqCst);

        println!("[GestureInterceptor] Event tap installed (keydown only)");
        CFRunLoopRun();
    });

    true
}

/// Disable the tap and stop its runloop thread. Safe to call repeatedly.
pub(super) fn teardown_tap() {
    unsafe {
        let tap = TAP.swap(null_mut(), Ordering::SeqCst);
        if tap.is_null() {
            return;
        }
        CGEventTapEnable(tap, false);

        let source = TAP_SOURCE.swap(null_mut(), Ordering::SeqCst);
        let run_loop = TAP_RUNLOOP.swap(null_mut(), Ordering::SeqCst);
        if !run_loop.is_null() {
            if !source.is_null() {
                CFRunLoopRemoveSource(
                    run_loop as CFRunLoopRef,
                    source as CFRunLoopSourceRef,
                    kCFRunLoopDefaultMode,
                );
            }
            CFRunLoopStop(run_loop as CFRunLoopRef);
        }

        println!("[GestureInterceptor] Event tap released");
    }
}
