//! Binary that emits command-line options markdown to stdout.
//!
//! Used by the docs build to regenerate `docs/reference/command-line-options.md`.

fn main() {
    print!("{}", datask_cli::render_options_markdown());
}
