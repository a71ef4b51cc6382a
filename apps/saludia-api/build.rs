fn main() {
    built::write_built_file().expect("Falla al generar información de compilación");
}
