//! Tag command handler

use crate::cli::TagArgs;
use crate::error::Result;
use crate::output::{OutputWriter, TagReport};

/// Handle the tag command
pub fn handle_tag(args: TagArgs, output: &mut OutputWriter) -> Result<()> {
    let directive = convgen_core::parse_tag(&args.raw)?;
    tracing::debug!(raw = %args.raw, parsed = directive.is_some(), "Tag parsed");

    output.tag(&TagReport {
        raw: args.raw,
        directive,
    })
}
