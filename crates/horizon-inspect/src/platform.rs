//! Windowing collaborator interface.
//!
//! The inspector draws nothing itself. Every realized control owns an
//! opaque [`PlatformHandle`] obtained from the canvas's
//! [`WindowingBackend`]; the canvas pushes attribute and visual-state
//! changes into it. Container handles parent their children's handles so
//! the native tree mirrors the control tree.
//!
//! [`HeadlessBackend`] is a complete backend with no native windows. It
//! records every handle operation, which makes it the backend of choice for
//! tests and batch tools.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::control::KindTag;

/// Opaque identifier of a native resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub u64);

/// An RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb`, `#rrggbbaa` or `r,g,b`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
                8 => Some(Self {
                    r: channel(0)?,
                    g: channel(2)?,
                    b: channel(4)?,
                    a: channel(6)?,
                }),
                _ => None,
            };
        }

        let parts: Vec<u8> = text
            .split(',')
            .map(|part| part.trim().parse().ok())
            .collect::<Option<_>>()?;
        match parts.as_slice() {
            [r, g, b] => Some(Self::rgb(*r, *g, *b)),
            [r, g, b, a] => Some(Self { r: *r, g: *g, b: *b, a: *a }),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// What the canvas asks the backend for when realizing a control.
#[derive(Debug, Clone)]
pub struct HandleRequest<'a> {
    /// Kind of the control.
    pub kind: KindTag,
    /// Control name.
    pub name: &'a str,
    /// Handle of the nearest realized ancestor.
    pub parent: Option<RawHandle>,
    /// Requested size.
    pub width: u32,
    pub height: u32,
}

/// A native resource backing one realized control.
pub trait PlatformHandle: Send {
    /// The opaque identifier.
    fn raw(&self) -> RawHandle;

    fn set_enabled(&mut self, enabled: bool);

    fn set_read_only(&mut self, read_only: bool);

    fn set_visible(&mut self, visible: bool);

    fn set_foreground(&mut self, color: Option<Color>);

    fn set_background(&mut self, color: Option<Color>);

    fn set_tooltip(&mut self, text: Option<&str>);

    fn set_drop_target(&mut self, accept: bool);

    /// Suspend (`false`) or resume (`true`) redrawing.
    fn set_redraw(&mut self, redraw: bool);

    /// Show a value. Check boxes receive `"true"`, `"false"` or the
    /// multi-value sentinel.
    fn set_value(&mut self, text: &str);

    /// Replace the items of a choice or list.
    fn set_items(&mut self, items: &[String]);

    /// Select an item of a choice or list.
    fn set_selection(&mut self, index: Option<usize>);

    /// Expand or collapse a panel.
    fn set_expanded(&mut self, expanded: bool);
}

/// Source of native resources for one canvas.
pub trait WindowingBackend: Send {
    /// Allocate a handle, or `None` if the backend cannot supply one.
    fn create_handle(&mut self, request: &HandleRequest<'_>) -> Option<Box<dyn PlatformHandle>>;

    /// Release a handle obtained from [`create_handle`](Self::create_handle).
    fn release_handle(&mut self, handle: Box<dyn PlatformHandle>) {
        drop(handle);
    }
}

/// One recorded handle operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOp {
    Created {
        handle: RawHandle,
        kind: KindTag,
        name: String,
        parent: Option<RawHandle>,
    },
    Released(RawHandle),
    Enabled(RawHandle, bool),
    ReadOnly(RawHandle, bool),
    Visible(RawHandle, bool),
    Foreground(RawHandle, Option<Color>),
    Background(RawHandle, Option<Color>),
    Tooltip(RawHandle, Option<String>),
    DropTarget(RawHandle, bool),
    Redraw(RawHandle, bool),
    Value(RawHandle, String),
    Items(RawHandle, Vec<String>),
    Selection(RawHandle, Option<usize>),
    Expanded(RawHandle, bool),
}

/// Shared record of every operation performed through a [`HeadlessBackend`].
#[derive(Clone, Default)]
pub struct HandleLog {
    ops: Arc<Mutex<Vec<HandleOp>>>,
}

impl HandleLog {
    fn push(&self, op: HandleOp) {
        self.ops.lock().push(op);
    }

    /// Snapshot of all operations so far.
    pub fn ops(&self) -> Vec<HandleOp> {
        self.ops.lock().clone()
    }

    /// Forget the recorded operations.
    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    /// Number of handles created so far.
    pub fn created(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, HandleOp::Created { .. }))
            .count()
    }

    /// Number of handles released so far.
    pub fn released(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, HandleOp::Released(_)))
            .count()
    }

    /// Handles created and not yet released.
    pub fn live(&self) -> usize {
        self.created() - self.released()
    }

    /// The handle created for the control named `name`, most recent first.
    pub fn handle_of(&self, name: &str) -> Option<RawHandle> {
        self.ops.lock().iter().rev().find_map(|op| match op {
            HandleOp::Created {
                handle, name: n, ..
            } if n == name => Some(*handle),
            _ => None,
        })
    }

    /// The last value shown on `handle`.
    pub fn last_value(&self, handle: RawHandle) -> Option<String> {
        self.ops.lock().iter().rev().find_map(|op| match op {
            HandleOp::Value(h, text) if *h == handle => Some(text.clone()),
            _ => None,
        })
    }

    /// The last expansion applied to `handle`.
    pub fn last_expanded(&self, handle: RawHandle) -> Option<bool> {
        self.ops.lock().iter().rev().find_map(|op| match op {
            HandleOp::Expanded(h, expanded) if *h == handle => Some(*expanded),
            _ => None,
        })
    }
}

impl fmt::Debug for HandleLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleLog")
            .field("ops", &self.ops.lock().len())
            .finish()
    }
}

struct HeadlessHandle {
    raw: RawHandle,
    log: HandleLog,
}

impl PlatformHandle for HeadlessHandle {
    fn raw(&self) -> RawHandle {
        self.raw
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.log.push(HandleOp::Enabled(self.raw, enabled));
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.log.push(HandleOp::ReadOnly(self.raw, read_only));
    }

    fn set_visible(&mut self, visible: bool) {
        self.log.push(HandleOp::Visible(self.raw, visible));
    }

    fn set_foreground(&mut self, color: Option<Color>) {
        self.log.push(HandleOp::Foreground(self.raw, color));
    }

    fn set_background(&mut self, color: Option<Color>) {
        self.log.push(HandleOp::Background(self.raw, color));
    }

    fn set_tooltip(&mut self, text: Option<&str>) {
        self.log
            .push(HandleOp::Tooltip(self.raw, text.map(str::to_string)));
    }

    fn set_drop_target(&mut self, accept: bool) {
        self.log.push(HandleOp::DropTarget(self.raw, accept));
    }

    fn set_redraw(&mut self, redraw: bool) {
        self.log.push(HandleOp::Redraw(self.raw, redraw));
    }

    fn set_value(&mut self, text: &str) {
        self.log.push(HandleOp::Value(self.raw, text.to_string()));
    }

    fn set_items(&mut self, items: &[String]) {
        self.log.push(HandleOp::Items(self.raw, items.to_vec()));
    }

    fn set_selection(&mut self, index: Option<usize>) {
        self.log.push(HandleOp::Selection(self.raw, index));
    }

    fn set_expanded(&mut self, expanded: bool) {
        self.log.push(HandleOp::Expanded(self.raw, expanded));
    }
}

/// A backend with no native windows.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    log: HandleLog,
    refused: HashSet<KindTag>,
    next: u64,
}

impl HeadlessBackend {
    /// A backend that supplies a handle for every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to supply handles for `kind`.
    pub fn refusing(mut self, kind: KindTag) -> Self {
        self.refused.insert(kind);
        self
    }

    /// The shared operation log.
    pub fn log(&self) -> HandleLog {
        self.log.clone()
    }
}

impl WindowingBackend for HeadlessBackend {
    fn create_handle(&mut self, request: &HandleRequest<'_>) -> Option<Box<dyn PlatformHandle>> {
        if self.refused.contains(&request.kind) {
            return None;
        }
        self.next += 1;
        let raw = RawHandle(self.next);
        self.log.push(HandleOp::Created {
            handle: raw,
            kind: request.kind,
            name: request.name.to_string(),
            parent: request.parent,
        });
        Some(Box::new(HeadlessHandle {
            raw,
            log: self.log.clone(),
        }))
    }

    fn release_handle(&mut self, handle: Box<dyn PlatformHandle>) {
        self.log.push(HandleOp::Released(handle.raw()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(
            Color::parse("#ff800080"),
            Some(Color {
                r: 255,
                g: 128,
                b: 0,
                a: 128
            })
        );
        assert_eq!(Color::parse("10, 20, 30"), Some(Color::rgb(10, 20, 30)));
        assert_eq!(Color::parse("#ff80"), None);
        assert_eq!(Color::parse("red"), None);
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "#010203");
    }

    #[test]
    fn test_headless_records() {
        let mut backend = HeadlessBackend::new();
        let log = backend.log();
        let request = HandleRequest {
            kind: KindTag::Value,
            name: "scale",
            parent: None,
            width: 10,
            height: 10,
        };
        let mut handle = backend.create_handle(&request).unwrap();
        handle.set_value("1.5");
        assert_eq!(log.handle_of("scale"), Some(handle.raw()));
        assert_eq!(log.last_value(handle.raw()).as_deref(), Some("1.5"));

        backend.release_handle(handle);
        assert_eq!(log.live(), 0);
    }

    #[test]
    fn test_headless_refusing() {
        let mut backend = HeadlessBackend::new().refusing(KindTag::Label);
        let request = HandleRequest {
            kind: KindTag::Label,
            name: "title",
            parent: None,
            width: 0,
            height: 0,
        };
        assert!(backend.create_handle(&request).is_none());
        assert_eq!(backend.log().created(), 0);
    }
}
