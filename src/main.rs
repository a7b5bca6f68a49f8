#[cfg(feature = "tui")]
fn main() -> anyhow::Result<()> {
    rpncalc::tui_mode::run_tui()
}

#[cfg(all(feature = "line", not(feature = "tui")))]
fn main() -> anyhow::Result<()> {
    rpncalc::line_mode::run_line()
}

// Без UI-фич остаётся обычный построчный режим
#[cfg(not(any(feature = "tui", feature = "line")))]
fn main() {
    use rpncalc::calc_engine::{evaluate, format_with_spaces};
    use std::io;

    println!("rpncalc - arithmetic expression calculator");
    println!("Operators: +, -, *, / with brackets and prefix signs");
    println!("Decimal separator: '.' or ',', results rounded to 2 places");
    println!("Enter an expression, or 'q' to quit\n");

    loop {
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }

        match evaluate(input) {
            Ok(result) => println!("{} = {}", format_with_spaces(input), result),
            Err(e) => println!("{} = Error: {}", format_with_spaces(input), e),
        }
    }
}
