fn main() {
    waitful_lib::run()
}
