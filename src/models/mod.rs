pub mod community;
pub mod movie;

pub use community::{AdminCommentView, CommentView, CommunityStats, User, UserView};
pub use movie::{Genre, Movie, MoviePage, TmdbGenreList, TmdbMovie, TmdbPage};
