#[cfg(test)]
pub const MANIFEST_DATA: &str = r#"{
  "posts": [
    {
      "url": "/blog/xss-basics/",
      "title": "XSS Basics",
      "excerpt": "What cross-site scripting is and why it keeps coming back.",
      "date": "2024-03-05 10:00:00 +0000",
      "categories": ["Security", "Web"],
      "content": "<p>Never trust input.</p>{% raw %}<pre><code>{{ payload }}</code></pre>{% endraw %}",
      "tags": ["xss", "owasp"]
    },
    {
      "url": "/blog/threat-modeling/",
      "title": "Threat Modeling 101",
      "excerpt": "Start with a diagram.",
      "date": "2023-11-20",
      "categories": [],
      "content": "<p>Draw the data flows first.</p>",
      "tags": []
    }
  ]
}"#;

#[cfg(test)]
pub const LIST_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Security Blog</title><meta charset="utf-8"></head>
<body>
<div class="blog-container">
  <main class="blog-main">
    <div class="blog-posts">
      <div class="blog-post-item">
        <h2 class="blog-post-title"><a href="/blog/sql-injection/">  SQL Injection in Practice </a></h2>
        <div class="post-meta">January 2, 2024 in Security</div>
        <p class="blog-post-excerpt">Parameterize &amp; sleep well.</p>
        <a class="blog-post-readmore" href="/blog/sql-injection/">Read more</a>
      </div>
      <div class="blog-post-item">
        <h2 class="blog-post-title"><a href="/blog/csrf/">CSRF Tokens</a></h2>
        <br>
        <img src="/img/csrf.png" alt="csrf">
      </div>
      <div class="blog-post-item">
        <h2 class="blog-post-title">No link here</h2>
      </div>
    </div>
  </main>
  <button class="blog-back-button" style="display: none"><span>&larr;</span> Back to posts</button>
</div>
</body>
</html>
"#;

#[cfg(test)]
pub const POST_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>SQL Injection in Practice - Security Blog</title></head>
<body>
<header class="site-header"><p class="site-title">Security Blog</p></header>
<article class="blog-post">
  <h1 class="post-title">SQL Injection in Practice</h1>
  <div class="post-meta"><time datetime="2024-01-02">January 2, 2024</time></div>
  <div class="post-content"><p>Use bind parameters.<br>Always.</p><pre><code>{% raw %}{{ not a template }}{% endraw %}</code></pre></div>
  <div class="post-tags"><h4>Tags:</h4><span class="tag">sqli</span></div>
</article>
</body>
</html>
"#;
