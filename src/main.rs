fn main() {
    if let Err(err) = roster_import::run() {
        match err.downcast_ref::<roster_import::ImportError>() {
            Some(import) => eprintln!("error: {}: {err}", import.code()),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}
