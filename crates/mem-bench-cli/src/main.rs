#![forbid(unsafe_code)]

fn main() {
    std::process::exit(mem_bench_cli::run());
}
