fn main() {
    use argon2::password_hash::PasswordHash;
    for s in ["not-a-phc-string", "$argon2id$broken"] {
        match PasswordHash::new(s) {
            Ok(h) => println!("{:?} parsed OK: alg={} hash_present={}", s, h.algorithm, h.hash.is_some()),
            Err(e) => println!("{:?} parse ERR: {}", s, e),
        }
    }
}
