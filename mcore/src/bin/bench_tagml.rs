#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::{env, fs};

use mcore::tagml;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        panic!("this binary requires exactly 1 argument") // the binary itself is also an arg
    }

    let path = &args[1];

    let raw = fs::read(path).expect("file exists and can be read");
    let value = tagml::decode(&raw).expect("decoded value");
    println!("{}", value)
}
