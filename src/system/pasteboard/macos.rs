//! NSPasteboard-backed implementation
//!
//! Fetches the general pasteboard per call rather than retaining it; the
//! revision counter (`changeCount`) is the only change-detection primitive
//! AppKit exposes.

use cocoa::base::{id, nil};
use cocoa::foundation::{NSString, NSUInteger};
use objc::{class, msg_send, sel, sel_impl};

use super::{Pasteboard, PasteboardKind};
use crate::shared::errors::{CommandError, CommandResult};

const UTI_TEXT: &str = "public.utf8-plain-text";
const UTI_TIFF: &str = "public.tiff";
const UTI_PNG: &str = "public.png";

pub struct SystemPasteboard;

impl SystemPasteboard {
    pub fn new() -> Self {
        Self
    }

    fn general() -> id {
        unsafe { msg_send![class!(NSPasteboard), generalPasteboard] }
    }

    unsafe fn read_data_for_type(board: id, uti: &str) -> Option<Vec<u8>> {
        let uti_str = NSString::alloc(nil).init_str(uti);
        let data: id = msg_send![board, dataForType: uti_str];
        if data == nil {
            return None;
        }

        let length: NSUInteger = msg_send![data, length];
        let bytes: *const u8 = msg_send![data, bytes];
        if bytes.is_null() || length == 0 {
            return None;
        }

        Some(std::slice::from_raw_parts(bytes, length as usize).to_vec())
    }
}

impl Default for SystemPasteboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Pasteboard for SystemPasteboard {
    fn change_count(&self) -> i64 {
        unsafe {
            let board = Self::general();
            msg_send![board, changeCount]
        }
    }

    fn types(&self) -> Vec<PasteboardKind> {
        unsafe {
            let board = Self::general();
            let types: id = msg_send![board, types];
            if types == nil {
                return Vec::new();
            }

            let count: NSUInteger = msg_send![types, count];
            let mut kinds = Vec::new();
            for i in 0..count {
                let uti: id = msg_send![types, objectAtIndex: i];
                if uti == nil {
                    continue;
                }
                let uti_cstr = std::ffi::CStr::from_ptr(NSString::UTF8String(uti));
                match uti_cstr.to_string_lossy().as_ref() {
                    UTI_TEXT => kinds.push(PasteboardKind::Text),
                    UTI_TIFF => kinds.push(PasteboardKind::Tiff),
                    UTI_PNG => kinds.push(PasteboardKind::Png),
                    _ => {}
                }
            }
            kinds
        }
    }

    fn read_text(&self) -> CommandResult<Option<String>> {
        unsafe {
            let board = Self::general();
            let uti_str = NSString::alloc(nil).init_str(UTI_TEXT);
            let value: id = msg_send![board, stringForType: uti_str];
            if value == nil {
                return Ok(None);
            }

            let value_cstr = std::ffi::CStr::from_ptr(NSString::UTF8String(value));
            Ok(Some(value_cstr.to_string_lossy().into_owned()))
        }
    }

    fn read_image(&self) -> CommandResult<Option<Vec<u8>>> {
        unsafe {
            let board = Self::general();
            // TIFF is the canonical raster representation; PNG is the fallback
            if let Some(bytes) = Self::read_data_for_type(board, UTI_TIFF) {
                return Ok(Some(bytes));
            }
            Ok(Self::read_data_for_type(board, UTI_PNG))
        }
    }

    fn write_text(&self, text: &str) -> CommandResult<()> {
        unsafe {
            let board = Self::general();
            let _: i64 = msg_send![board, clearContents];

            let uti_str = NSString::alloc(nil).init_str(UTI_TEXT);
            let value = NSString::alloc(nil).init_str(text);
            let ok: bool = msg_send![board, setString: value forType: uti_str];
            if !ok {
                return Err(CommandError::ClipboardError(
                    "Failed to write text to pasteboard".to_string(),
                ));
            }
            Ok(())
        }
    }

    fn write_image(&self, bytes: &[u8]) -> CommandResult<()> {
        unsafe {
            let board = Self::general();
            let _: i64 = msg_send![board, clearContents];

            let data: id = msg_send![class!(NSData),
                dataWithBytes: bytes.as_ptr() as *const std::os::raw::c_void
                length: bytes.len() as NSUInteger];
            if data == nil {
                return Err(CommandError::ClipboardError(
                    "Failed to build NSData for pasteboard write".to_string(),
                ));
            }

            let uti_str = NSString::alloc(nil).init_str(UTI_TIFF);
            let ok: bool = msg_send![board, setData: data forType: uti_str];
            if !ok {
                return Err(CommandError::ClipboardError(
                    "Failed to write image to pasteboard".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Only run manually as it touches the live pasteboard
    fn test_roundtrip_text_on_live_pasteboard() {
        let board = SystemPasteboard::new();
        let before = board.change_count();

        board.write_text("clipfolio pasteboard test").expect("write");
        assert!(board.change_count() > before);
        assert_eq!(
            board.read_text().expect("read"),
            Some("clipfolio pasteboard test".to_string())
        );
    }
}
