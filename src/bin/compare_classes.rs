use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    potency::apps::run_compare_classes(std::env::args().skip(1))
}
