//! Templates command implementation.

use crate::cli::TemplatesArgs;
use crate::error::Result;
use crate::output::Formatter;
use citescrape_extractor::TEMPLATES;

/// Execute the templates command.
pub fn execute_templates(args: TemplatesArgs) -> Result<()> {
    let formatter = Formatter::new(args.format.into(), !args.no_color);
    println!("{}", formatter.format_templates(TEMPLATES)?);
    Ok(())
}
