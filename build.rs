//! Compiles `data/disposable_email_blocklist.conf` into a static `phf::Set`.
//!
//! The file uses the upstream disposable-email-domains layout: one domain
//! per line, `#` comments and blank lines ignored.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

const BLOCKLIST: &str = "data/disposable_email_blocklist.conf";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={BLOCKLIST}");

    let raw = fs::read_to_string(BLOCKLIST)
        .unwrap_or_else(|err| panic!("failed to read {BLOCKLIST}: {err}"));
    let domains: BTreeSet<String> = raw
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.trim_end_matches('.').to_ascii_lowercase())
        .collect();

    let mut set = phf_codegen::Set::new();
    for domain in &domains {
        set.entry(domain.as_str());
    }

    let out = Path::new(&env::var("OUT_DIR").expect("OUT_DIR set by cargo"))
        .join("disposable_domains.rs");
    let mut file = BufWriter::new(fs::File::create(&out).expect("create generated blocklist"));
    writeln!(
        file,
        "/// Disposable and throw-away mail providers known at build time.\n\
         static BUILTIN: phf::Set<&'static str> = {};",
        set.build()
    )
    .expect("write generated blocklist");
}
