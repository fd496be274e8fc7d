include!(concat!(env!("OUT_DIR"), "/help_content.rs"));

/// Help text embedded from `docs/HELP.md` at build time.
pub fn get_help_content() -> &'static str {
    HELP_CONTENT
}
