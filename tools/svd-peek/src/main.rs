use std::process::ExitCode;

use clap::Parser;
use cli::Args;
use dump::DumpReader;
use regmap::{Peek, Session};

mod cli;
mod dump;
mod render;

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Schema(#[from] regmap::Error),
    #[error("failed to open memory dump `{}`: {source}", path.display())]
    Dump {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

fn run(args: Args) -> Result<(), Failure> {
    let mut session = Session::new(args.svd.clone(), args.loader_config());
    if args.list {
        print!("{}", render::Listing(session.memory_map()?));
        return Ok(());
    }
    let Some(address) = args.addr else {
        return Ok(());
    };
    log::debug!("Decoding {:#010x} with {}", address, session.source_id());

    let peek = match (args.val, &args.dump, args.dump_base) {
        // Literal values may be up to 64 bits wide, so they bypass the word reader.
        (Some(value), ..) => match session.lookup(address)? {
            Some(register) => Peek::Decoded(register.decode_value(value)),
            None => Peek::NotInMap,
        },
        (None, Some(path), Some(base)) => {
            let mut reader = DumpReader::open(path, base).map_err(|source| Failure::Dump {
                path: path.clone(),
                source,
            })?;
            log::info!("Reading {:#010x} from {} (base {:#010x})", address, path.display(), base);
            session.peek(address, &mut reader)?
        }
        _ => return Ok(()),
    };

    match peek {
        Peek::Decoded(decoded) => print!("{}", render::Report(&decoded)),
        Peek::NotInMap => println!("{}", render::NotFound(address)),
        Peek::ReadFailed => println!("Failed to read memory at {address:#010x}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("regmap=warn,warn"),
    )
    .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
