fn main() {
    std::thread::Builder::new()
        .stack_size(heron::stack_size::STACK_SIZE)
        .spawn(|| {
            heron::usi::cmd_loop();
        })
        .unwrap()
        .join()
        .unwrap();
}
