fn main() {
    king_me::cli::run();
}
