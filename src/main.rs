fn main() -> anyhow::Result<()> {
    tubegrab_lib::run()
}
