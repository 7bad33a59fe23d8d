//! `ionicfs` — host-side authoring tool for IonicFS disk images.

mod cli;

fn main() {
    cli::main();
}
