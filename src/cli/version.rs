/// Display version information
pub fn execute() {
    println!("exedao {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the exedao policy engine");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        // Version command should not panic
        execute();
    }
}
