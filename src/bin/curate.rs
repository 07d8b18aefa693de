use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    potency::apps::run_curate(std::env::args().skip(1))
}
