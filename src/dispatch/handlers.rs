//! Standard handlers for a secondary screen
//!
//! One handler per inbound message. Input events go to the input sink,
//! queries are answered from the display source, and error messages from
//! the primary end the connection.

use super::context::{HandlerContext, ProtocolVersion};
use super::table::HandlerTable;
use super::{HandlerResult, Outcome, TerminationReason};
use crate::input::{InputEvent, KeyEvent, Modifiers, MouseButton};
use crate::protocol::{names, ArgumentError, ParsedMessage, Value, VectorItem};

/// Handler table covering the whole inbound vocabulary
pub fn standard_handlers() -> HandlerTable {
    HandlerTable::new()
        .with("hello", hello)
        .with("c_close", c_close)
        .with("c_enter", c_enter)
        .with("c_leave", c_leave)
        .with("c_clipboard", c_clipboard)
        .with("c_screen_saver", c_screen_saver)
        .with("c_reset_options", c_reset_options)
        .with("c_info_ack", c_info_ack)
        .with("c_keep_alive", c_keep_alive)
        .with("d_key_down_lang", d_key_down_lang)
        .with("d_key_down", d_key_down)
        .with("d_key_repeat", d_key_repeat)
        .with("d_key_up", d_key_up)
        .with("d_mouse_down", d_mouse_down)
        .with("d_mouse_up", d_mouse_up)
        .with("d_mouse_move", d_mouse_move)
        .with("d_mouse_rel_move", d_mouse_rel_move)
        .with("d_mouse_wheel", d_mouse_wheel)
        .with("d_clipboard", d_clipboard)
        .with("d_set_options", d_set_options)
        .with("d_file_transfer", d_file_transfer)
        .with("d_drag_info", d_drag_info)
        .with("d_secure_input_notification", d_secure_input_notification)
        .with("d_language_synchronisation", d_language_synchronisation)
        .with("q_info", q_info)
        .with("e_incompatible", e_incompatible)
        .with("e_busy", e_busy)
        .with("e_unknown", e_unknown)
        .with("e_bad", e_bad)
}

fn inject(ctx: &mut HandlerContext<'_>, event: InputEvent) -> HandlerResult {
    ctx.input.inject(event)?;
    Ok(Outcome::Done)
}

/// Optional language code; empty strings mean none
fn language(msg: &ParsedMessage, index: usize) -> Result<Option<String>, ArgumentError> {
    let raw = msg.bytes(index)?;
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(raw).into_owned()))
}

/// Clamp a value to what a `%2i` field carries
fn wire_i16(value: i32) -> i32 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX))
}

/// Record the pointer position, kept on screen and within the wire range
fn track_cursor(ctx: &mut HandlerContext<'_>, x: i32, y: i32) {
    let (x, y) = match ctx.display.geometry() {
        Ok(g) => (
            x.clamp(g.x, g.x.saturating_add(g.width.saturating_sub(1)).max(g.x)),
            y.clamp(g.y, g.y.saturating_add(g.height.saturating_sub(1)).max(g.y)),
        ),
        Err(_) => (x, y),
    };
    ctx.state.cursor = Some((wire_i16(x), wire_i16(y)));
}

fn hello(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let server = ProtocolVersion::new(msg.int(0)?, msg.int(1)?);
    tracing::info!("Connected to server v{}", server);
    ctx.state.server_version = Some(server);

    let ours = ctx.state.version;
    Ok(Outcome::Reply(ParsedMessage::new(
        names::HELLO_BACK,
        vec![
            ours.major.into(),
            ours.minor.into(),
            ctx.state.client_name.as_str().into(),
        ],
    )))
}

fn c_close(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::info!("Server closed the connection");
    Ok(Outcome::Terminate(TerminationReason::Closed))
}

fn c_enter(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (x, y) = (msg.int(0)?, msg.int(1)?);
    let sequence = msg.int(2)?;
    let modifiers = Modifiers::from_wire(msg.int(3)?);

    ctx.state.enter_sequence = sequence;
    ctx.state.on_screen = true;
    track_cursor(ctx, x, y);
    tracing::debug!("Enter at ({}, {}) seq={}", x, y, sequence);

    inject(ctx, InputEvent::Enter { x, y, modifiers })
}

fn c_leave(ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    ctx.state.on_screen = false;
    tracing::debug!("Leave");
    inject(ctx, InputEvent::Leave)
}

fn c_clipboard(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (id, sequence) = (msg.int(0)?, msg.int(1)?);
    tracing::debug!("Clipboard {} grabbed (seq={})", id, sequence);
    Ok(Outcome::Done)
}

fn c_screen_saver(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let active = msg.int(0)? != 0;
    inject(ctx, InputEvent::ScreenSaver { active })
}

fn c_reset_options(ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::debug!("Resetting {} options", ctx.state.options.len());
    ctx.state.options.clear();
    Ok(Outcome::Done)
}

fn c_info_ack(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::debug!("Screen info acknowledged");
    Ok(Outcome::Done)
}

fn c_keep_alive(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    Ok(Outcome::Reply(ParsedMessage::bare(names::C_KEEP_ALIVE)))
}

fn d_key_down_lang(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let key = KeyEvent::from_wire(msg.int(0)?, msg.int(1)?, msg.int(2)?)
        .with_language(language(msg, 3)?);
    inject(ctx, InputEvent::KeyDown(key))
}

fn d_key_down(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let key = KeyEvent::from_wire(msg.int(0)?, msg.int(1)?, msg.int(2)?);
    inject(ctx, InputEvent::KeyDown(key))
}

fn d_key_repeat(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let count = msg.int(2)?;
    let key = KeyEvent::from_wire(msg.int(0)?, msg.int(1)?, msg.int(3)?);
    inject(ctx, InputEvent::KeyRepeat { key, count })
}

fn d_key_up(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let key = KeyEvent::from_wire(msg.int(0)?, msg.int(1)?, msg.int(2)?);
    inject(ctx, InputEvent::KeyUp(key))
}

fn d_mouse_down(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    inject(ctx, InputEvent::MouseDown(MouseButton::from_wire(msg.int(0)?)))
}

fn d_mouse_up(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    inject(ctx, InputEvent::MouseUp(MouseButton::from_wire(msg.int(0)?)))
}

fn d_mouse_move(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (x, y) = (msg.int(0)?, msg.int(1)?);
    track_cursor(ctx, x, y);
    inject(ctx, InputEvent::MouseMove { x, y })
}

fn d_mouse_rel_move(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (dx, dy) = (msg.int(0)?, msg.int(1)?);
    if let Some((x, y)) = ctx.state.cursor {
        track_cursor(ctx, x.saturating_add(dx), y.saturating_add(dy));
    }
    inject(ctx, InputEvent::MouseRelativeMove { dx, dy })
}

fn d_mouse_wheel(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (dx, dy) = (msg.int(0)?, msg.int(1)?);
    inject(ctx, InputEvent::MouseWheel { dx, dy })
}

fn d_clipboard(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (id, sequence, mark) = (msg.int(0)?, msg.int(1)?, msg.int(2)?);
    let data = msg.bytes(3)?;
    tracing::debug!(
        "Clipboard {} data: seq={} mark={} {} bytes",
        id,
        sequence,
        mark,
        data.len()
    );
    Ok(Outcome::Done)
}

fn d_set_options(ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    for pair in msg.vector(0)?.chunks(2) {
        match pair {
            [VectorItem::Tag(name), VectorItem::Int(value)] => {
                tracing::debug!("Option {} = {}", name, value);
                ctx.state.options.insert(name.clone(), *value);
            }
            other => tracing::warn!("Ignoring malformed option entry {:?}", other),
        }
    }
    Ok(Outcome::Done)
}

fn d_file_transfer(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let (mark, data) = (msg.int(0)?, msg.bytes(1)?);
    tracing::debug!("File transfer mark={} ({} bytes), not supported", mark, data.len());
    Ok(Outcome::Done)
}

fn d_drag_info(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let count = msg.int(0)?;
    tracing::debug!("Drag info for {} objects, not supported", count);
    Ok(Outcome::Done)
}

fn d_secure_input_notification(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let app = Value::Bytes(msg.bytes(0)?.clone());
    tracing::info!("Secure input enabled on server by {}", app);
    Ok(Outcome::Done)
}

fn d_language_synchronisation(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let languages = msg.bytes(0)?;
    tracing::debug!("Server languages: {}", String::from_utf8_lossy(languages));
    Ok(Outcome::Done)
}

fn q_info(ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    let geometry = ctx.display.geometry()?;
    let (cursor_x, cursor_y) = ctx
        .state
        .cursor
        .unwrap_or((geometry.cursor_x, geometry.cursor_y));
    tracing::debug!(
        "Reporting screen {}x{} at ({}, {})",
        geometry.width,
        geometry.height,
        geometry.x,
        geometry.y
    );

    Ok(Outcome::Reply(ParsedMessage::new(
        names::D_INFO,
        vec![
            wire_i16(geometry.x).into(),
            wire_i16(geometry.y).into(),
            wire_i16(geometry.width).into(),
            wire_i16(geometry.height).into(),
            // warp zone size, obsolete
            0.into(),
            wire_i16(cursor_x).into(),
            wire_i16(cursor_y).into(),
        ],
    )))
}

fn e_incompatible(_ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
    let server = ProtocolVersion::new(msg.int(0)?, msg.int(1)?);
    tracing::error!("Incompatible protocol version, server speaks {}", server);
    Ok(Outcome::Terminate(TerminationReason::IncompatibleVersion(server)))
}

fn e_busy(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::error!("Screen name already in use");
    Ok(Outcome::Terminate(TerminationReason::NameInUse))
}

fn e_unknown(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::error!("Screen name not in the server configuration");
    Ok(Outcome::Terminate(TerminationReason::UnknownClient))
}

fn e_bad(_ctx: &mut HandlerContext<'_>, _msg: &ParsedMessage) -> HandlerResult {
    tracing::error!("Server reported a protocol violation");
    Ok(Outcome::Terminate(TerminationReason::ProtocolViolation))
}
