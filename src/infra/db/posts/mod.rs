mod read;
mod types;
mod write;

/// Shared projection joining each post with its author and optional group.
const POST_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.image_path, \
     a.id AS author_id, a.username AS author_username, \
     g.id AS group_id, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN authors a ON a.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

/// Newest first; the id breaks ties between posts created in the same instant.
const POST_ORDER: &str = " ORDER BY p.created_at DESC, p.id DESC";
