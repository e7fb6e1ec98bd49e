use hopscotch_map::{HopscotchMap, HopscotchMapBuilder};

fn main() {
    env_logger::init();

    println!("Hopscotch Map - Basic Usage Example");
    println!("====================================");

    // Method 1: Creating from a HashMap-style literal via set()
    println!("\nCreating a map and inserting prices:");
    let mut prices: HopscotchMap<String, f64> = HopscotchMap::new();
    prices.set("apple".to_string(), 1.50);
    prices.set("banana".to_string(), 0.75);
    prices.set("orange".to_string(), 2.00);
    prices.set("grape".to_string(), 3.25);
    println!("Map created with {} items", prices.len());

    println!("\nLookups:");
    for fruit in ["apple", "banana", "grape", "kiwi"] {
        match prices.get(&fruit.to_string()) {
            Ok(price) => println!("  [OK] {fruit}: ${price:.2}"),
            Err(_) => println!("  [NOT FOUND] {fruit}: not found"),
        }
    }

    // Method 2: Building from a fixed set of entries
    println!("\nBuilding a map from entries:");
    let colors: HopscotchMap<String, String> = HopscotchMapBuilder::new()
        .insert("red".to_string(), "#FF0000".to_string())
        .insert("green".to_string(), "#00FF00".to_string())
        .insert("blue".to_string(), "#0000FF".to_string())
        .insert("yellow".to_string(), "#FFFF00".to_string())
        .build();
    println!("Color map built with {} items", colors.len());

    println!("\nColor codes:");
    for (color, code) in colors.iter_items() {
        println!("  - {color}: {code}");
    }

    // set_default: insert only if absent, return the resident value either way
    println!("\nset_default example:");
    let mut counts: HopscotchMap<&str, i32> = HopscotchMap::new();
    println!("  first call returns {}", counts.set_default("hits", 0));
    counts.set("hits", counts.get(&"hits").unwrap() + 1);
    println!(
        "  second call (now present) returns {}",
        counts.set_default("hits", 0)
    );

    // Missing-key error example
    println!("\nMissing-key error example:");
    match colors.get(&"purple".to_string()) {
        Ok(code) => println!("  Found: {code}"),
        Err(e) => println!("  Error: {e}"),
    }

    // Removal
    println!("\nRemoving an entry:");
    let mut fruits = prices.copy();
    fruits.remove(&"banana".to_string()).unwrap();
    println!("  {} items remain after removing banana", fruits.len());

    // Draining with pop_any
    println!("\nDraining with pop_any:");
    while let Ok((fruit, price)) = fruits.pop_any() {
        println!("  drained {fruit}: ${price:.2}");
    }

    println!("\nBasic usage demonstration complete!");
}
