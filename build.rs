fn main() {
    // sqlx::migrate! embeds the schema at compile time
    println!("cargo:rerun-if-changed=migrations");
}
