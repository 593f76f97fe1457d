//! Hand-off to the command engine.

use log::{debug, warn};

use crate::app::events::DispatchExit;
use crate::app::ports::{DispatchContext, ProtocolEngine};

/// Block in the command engine until it reports an abort.
///
/// An engine that returns without raising abort has broken its contract;
/// the abort is requested here instead so the loop still passes through a
/// full reset before dispatching again.
pub fn dispatch<M, P: ProtocolEngine<M>>(
    engine: &mut P,
    ctx: &mut DispatchContext<'_>,
    hw: &mut M,
) -> DispatchExit {
    debug!("dispatch: entering command engine, state={:?}", ctx.sys.state);
    engine.run(ctx, hw);

    let forced = !ctx.rt.abort_requested();
    if forced {
        warn!("dispatch: engine returned without abort, forcing reset");
        ctx.rt.request_abort();
    }

    DispatchExit {
        exec_state: ctx.rt.exec_state(),
        exec_alarm: ctx.rt.exec_alarm(),
        forced,
    }
}
