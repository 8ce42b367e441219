// rill: debug driver for the Rill front end.
//
// Reads one source file, parses it, and dumps the AST.  The real compiler
// driver (code generation, linking, running) is a separate tool.

use std::{env, fs, process};

use rill::parser;

fn main() {
    let mut args = env::args();
    let cmd = args.next().unwrap_or_else(|| "rill".to_string());
    let Some(path) = args.next() else {
        eprintln!("Usage: {} <input-file>", cmd);
        process::exit(2);
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("ERROR: cannot read '{}': {}", path, err);
            process::exit(1);
        }
    };

    let ast = parser::parse_source_or_exit(&path, &source);
    ast.print();
}
