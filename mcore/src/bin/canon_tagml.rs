use std::{env, fs, io};

use mcore::tagml::{self, Writer};

/// Reads a document, decodes it and re-emits the canonical form on stdout.
/// Useful for normalizing hand-edited files before diffing.
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        panic!("this binary expects 1 argument")
    }

    let raw = fs::read(&args[1])?;
    let value = tagml::decode(&raw)?;

    let stdout = io::stdout();
    let mut writer = Writer::new(stdout.lock());
    writer.write_prolog()?;
    writer.write(&value)?;
    Ok(())
}
