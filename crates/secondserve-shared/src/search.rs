use crate::models::ListingWithOwner;

/// Case-insensitive substring match over title, address and description.
/// A blank query matches everything.
pub fn matches_query(listing: &ListingWithOwner, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    let l = &listing.listing;
    [&l.title, &l.address, &l.description]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}

pub fn filter_listings(listings: Vec<ListingWithOwner>, query: &str) -> Vec<ListingWithOwner> {
    listings
        .into_iter()
        .filter(|l| matches_query(l, query))
        .collect()
}
