use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    potency::apps::run_evaluate_predictions(std::env::args().skip(1))
}
